/// Every built-in operator the interpreter implements
///
/// Operators are registered under their surface name together with a typed
/// signature in `builtin::operator_table`; a name shared by several variants
/// (for example `copy`, or the transformation operators with and without an
/// explicit matrix operand) is resolved against the operand stack at call
/// time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    // Operand stack manipulation
    /// discards the top element
    ///
    /// any `pop` –
    Pop,

    /// exchanges the top two elements
    ///
    /// any1 any2 `exch` any2 any1
    Exch,

    Dup,

    /// duplicates the top n elements. This form of copy operates only on the
    /// objects themselves, not on the values of composite objects
    ///
    /// any1 … anyn n `copy` any1 … anyn any1 … anyn
    CopyN,

    /// pushes a copy of the nth element counting from the top, where n = 0
    /// designates the top element
    ///
    /// anyn … any0 n `index` anyn … any0 anyn
    Index,

    /// performs a circular shift of the top n elements by j positions, where
    /// positive j moves elements toward the top of the stack. n must be a
    /// nonnegative integer and at least n elements must be present beneath
    /// the two operands
    ///
    /// an−1 … a0 n j `roll` a(j−1) mod n … a0 an−1 … aj mod n
    Roll,

    Clear,

    /// counts the number of items on the operand stack and pushes this count
    /// on the operand stack
    ///
    /// any1 … anyn `count` any1 … anyn n
    Count,

    /// pushes a mark object on the operand stack
    ///
    /// All marks are identical, and the operand stack may contain any number
    /// of them at once
    Mark,

    /// pops entries from the operand stack repeatedly until it encounters a
    /// mark, which it also pops
    ///
    /// mark obj1 … objn `cleartomark` –
    ClearToMark,

    /// counts the number of objects on the stack above the topmost mark
    ///
    /// mark obj1 … objn `counttomark` mark obj1 … objn n
    CountToMark,

    // Arithmetic
    /// returns the sum of num1 and num2. If both operands are integers and
    /// the result is within integer range, the result is an integer;
    /// otherwise, the result is a real number
    ///
    /// num1 num2 `add` sum
    Add,

    /// num1 num2 `sub` difference
    Sub,

    /// num1 num2 `mul` product
    Mul,

    /// divides num1 by num2, producing a result that is always a real number
    /// even if both operands are integers
    ///
    /// num1 num2 `div` quotient
    Div,

    /// divides int1 by int2 and returns the integer part of the quotient,
    /// with any fractional part discarded. Both operands must be integers
    ///
    /// int1 int2 `idiv` quotient
    Idiv,

    /// returns the remainder of dividing int1 by int2. The sign of the
    /// result is the sign of int1
    ///
    /// int1 int2 `mod` remainder
    Mod,

    Neg,
    Abs,

    /// returns the least integer value greater than or equal to num1. The
    /// type of the result is the same as the type of the operand
    ///
    /// num1 `ceiling` num2
    Ceiling,

    /// returns the greatest integer value less than or equal to num1
    ///
    /// num1 `floor` num2
    Floor,

    /// rounds to the nearest integer value, with ties rounding away from
    /// zero
    ///
    /// num1 `round` num2
    Round,

    /// discards the fractional part, truncating toward zero
    ///
    /// num1 `truncate` num2
    Truncate,

    Sqrt,

    /// returns the angle, in degrees between 0 and 360, whose tangent is
    /// num/den. Either operand may be zero, but not both
    ///
    /// num den `atan` angle
    Atan,

    /// angle `cos` real — the argument is in degrees
    Cos,

    /// angle `sin` real — the argument is in degrees
    Sin,

    /// raises base to the exponent power. The operands may be any numbers
    ///
    /// base exponent `exp` real
    Exp,

    /// returns the natural logarithm of num
    ///
    /// num `ln` real
    Ln,

    /// returns the common (base 10) logarithm of num
    ///
    /// num `log` real
    Log,

    /// returns a pseudo-random integer in the range 0 to 2^31 − 1
    ///
    /// `rand` int
    Rand,

    /// initializes the pseudo-random number generator with the seed int
    ///
    /// int `srand` –
    SRand,

    /// returns an integer representing the current state of the random
    /// number generator, suitable as an operand to srand
    ///
    /// `rrand` int
    RRand,

    // Relational, boolean, and bitwise
    /// pops two objects and pushes true if they are equal, false if not.
    /// Integers and reals representing the same mathematical value compare
    /// equal, as do strings and names with the same sequence of characters.
    /// Other composite objects are equal only if they share the same
    /// identity
    Eq,
    Ne,

    /// pops two objects and pushes true if the first is less than the
    /// second. Numbers compare by mathematical value; strings compare
    /// element by element, treating the elements as integers in the range 0
    /// to 255. Mixing a string and a number is a typecheck error
    ///
    /// num1 num2 `lt` bool
    /// string1 string2 `lt` bool
    Lt,
    Le,
    Gt,
    Ge,

    /// returns the logical conjunction of the operands if they are boolean.
    /// If the operands are integers, returns the bitwise and of their binary
    /// representations
    ///
    /// bool1 bool2 `and` bool3
    /// int1 int2 `and` int3
    And,
    Or,
    Xor,
    Not,
    True,
    False,

    /// shifts the binary representation of int1 left by shift bits. A
    /// negative shift is an arithmetic shift right
    ///
    /// int1 shift `bitshift` int2
    BitShift,

    // Arrays
    /// creates an array of length n, each of whose elements is initialized
    /// with a null object
    ///
    /// int `array` array
    Array,

    /// marks the end of a bracketed array literal: pops objects down to the
    /// topmost mark and replaces the mark with an array containing them
    ///
    /// mark obj0 … objn−1 `]` array
    ArrayEnd,

    /// returns the number of elements of an array, packed array, or string,
    /// the number of entries of a dictionary, or the number of characters of
    /// a name
    Length,

    /// fetches a single element: by index from an array, packed array, or
    /// string, or by key from a dictionary
    ///
    /// array index `get` any
    /// dict key `get` any
    /// string index `get` int
    Get,

    /// replaces a single element of the first operand: by index for arrays
    /// and strings, by key for dictionaries. The index must lie in the range
    /// 0 to n − 1, where n is the length of the container
    Put,

    /// creates a new object whose value is a copy of a section of the
    /// operand
    ///
    /// array index count `getinterval` subarray
    /// string index count `getinterval` substring
    GetInterval,

    /// overwrites a section of the first operand with the contents of the
    /// third. The section must fit: index + length of the source may equal,
    /// but not exceed, the length of the destination
    ///
    /// array1 index array2 `putinterval` –
    /// string1 index string2 `putinterval` –
    PutInterval,

    /// stores the top n objects of the stack into array, where n is the
    /// length of array, and pushes array back
    ///
    /// any0 … anyn−1 array `astore` array
    AStore,

    /// pushes all elements of array onto the stack, followed by array itself
    ///
    /// array `aload` any0 … anyn−1 array
    ALoad,

    /// copies all elements of the first composite object into the second,
    /// which must be at least as long, and returns the initial interval of
    /// the second operand into which the elements were copied
    ///
    /// array1 array2 `copy` subarray2
    /// string1 string2 `copy` substring2
    /// dict1 dict2 `copy` dict2
    CopyComposite,

    /// enumerates the elements of the first operand, executing proc once per
    /// element. Array elements are pushed as objects, string elements as
    /// integers, and dictionary entries as a key and value pair
    ///
    /// array proc `forall` –
    /// string proc `forall` –
    /// dict proc `forall` –
    ForAll,

    // Strings
    /// creates a string of length n, initialized with zeros
    ///
    /// int `string` string
    String,

    /// determines whether string begins with seek. On success pushes the
    /// matched and remaining substrings and true; on failure pushes the
    /// original string and false
    ///
    /// string seek `anchorsearch` post match true
    /// string seek `anchorsearch` string false
    AnchorSearch,

    /// looks for the first occurrence of seek within string
    ///
    /// string seek `search` post match pre true
    /// string seek `search` string false
    Search,

    /// reads the first token from string using the scanner's syntax. On
    /// success pushes the unread remainder, the token, and true
    ///
    /// string `token` post any true
    /// string `token` false
    Token,

    // Dictionaries
    /// creates an empty dictionary with a maximum capacity of int entries
    ///
    /// int `dict` dict
    Dict,

    /// marks the end of a `<< … >>` dictionary literal: pops key-value pairs
    /// down to the topmost mark
    ///
    /// mark key1 value1 … keyn valuen `>>` dict
    DictEnd,

    /// returns the capacity of the dictionary — the maximum number of
    /// entries it can hold, as opposed to its current number of entries,
    /// which is returned by length
    ///
    /// dict `maxlength` int
    MaxLength,

    /// pushes dict on the dictionary stack, making it the current dictionary
    ///
    /// dict `begin` –
    Begin,

    /// pops the dictionary stack. Popping either of the two bottom
    /// dictionaries is a dictstackunderflow error
    End,

    /// associates key with value in the current dictionary — the one on the
    /// top of the dictionary stack
    ///
    /// key value `def` –
    Def,

    /// searches for key in each dictionary on the dictionary stack, starting
    /// with the topmost, and pushes the associated value
    ///
    /// key `load` value
    Load,

    /// replaces the value of the topmost definition of key anywhere on the
    /// dictionary stack, or defines it in the current dictionary if no
    /// definition exists
    ///
    /// key value `store` –
    Store,

    /// removes key and its value from dict
    ///
    /// dict key `undef` –
    Undef,

    /// returns true if there is an entry in dict whose key is key. dict does
    /// not have to be on the dictionary stack
    ///
    /// dict key `known` bool
    Known,

    /// determines which dictionary on the dictionary stack, if any, defines
    /// key
    ///
    /// key `where` dict true
    /// key `where` false
    Where,

    CurrentDict,
    CountDictStack,

    /// stores the elements of the dictionary stack into array and returns
    /// the interval of array holding them, bottommost dictionary first
    ///
    /// array `dictstack` subarray
    DictStack,

    /// pops the dictionary stack down to the two permanent entries
    ClearDictStack,

    // Control
    /// executes an arbitrary object: procedures run, executable names are
    /// looked up, literal objects push themselves
    ///
    /// any `exec` –
    Exec,

    /// executes proc if bool is true
    ///
    /// bool proc `if` –
    If,

    /// executes proc1 if bool is true and proc2 otherwise
    ///
    /// bool proc1 proc2 `ifelse` –
    IfElse,

    /// executes proc repeatedly, passing it a sequence of control values
    /// from initial by steps of increment to limit. If increment is
    /// positive, the loop terminates when the control variable becomes
    /// greater than limit; if negative, when it becomes less than limit
    ///
    /// initial increment limit proc `for` –
    For,

    /// executes proc n times
    ///
    /// int proc `repeat` –
    Repeat,

    /// executes proc an indefinite number of times, until proc executes exit
    /// or stop
    ///
    /// proc `loop` –
    Loop,

    /// terminates execution of the innermost active looping context.
    /// Executing exit with no enclosing loop is an invalidexit error
    Exit,

    /// terminates the innermost stopped context, unwinding the execution
    /// stack to it
    Stop,

    /// executes any, catching both raised errors and stop. Pushes false if
    /// execution ran to completion and true if it was terminated early; in
    /// the latter case the operand stack is left as the interrupted program
    /// left it
    ///
    /// any `stopped` bool
    Stopped,

    CountExecStack,

    /// stores a snapshot of the execution stack into array
    ///
    /// array `execstack` subarray
    ExecStack,

    /// terminates the interpreter
    Quit,

    /// the outermost interpreter procedure; a no-op here since the embedder
    /// drives execution directly
    Start,

    // Graphics state
    GSave,
    GRestore,
    SetLineWidth,
    CurrentLineWidth,
    SetLineCap,
    CurrentLineCap,
    SetLineJoin,
    CurrentLineJoin,
    SetMiterLimit,
    CurrentMiterLimit,

    /// sets the dash pattern. An empty array produces solid strokes; offset
    /// gives the phase, in user space units, at which the pattern starts
    ///
    /// array offset `setdash` –
    SetDash,

    /// `currentdash` array offset
    CurrentDash,

    /// sets the color space to DeviceRGB and the current color to the given
    /// component values, each a number between 0 and 1
    ///
    /// red green blue `setrgbcolor` –
    SetRgbColor,

    /// `currentrgbcolor` red green blue
    CurrentRgbColor,

    /// sets the color space to DeviceGray and the gray level, between 0
    /// (black) and 1 (white)
    ///
    /// num `setgray` –
    SetGray,

    /// `currentgray` num
    CurrentGray,

    SetColorSpace,

    // Coordinate systems and transformations
    /// creates a six-element array representing the identity matrix
    ///
    /// `matrix` matrix
    MatrixOp,

    /// fills matrix with the current transformation matrix and pushes it
    /// back
    ///
    /// matrix `currentmatrix` matrix
    CurrentMatrix,

    /// replaces the current transformation matrix with matrix
    ///
    /// matrix `setmatrix` –
    SetMatrix,

    /// moves the user space origin by (tx, ty)
    ///
    /// tx ty `translate` –
    Translate,

    /// fills matrix with a translation matrix instead of modifying the CTM
    ///
    /// tx ty matrix `translate` matrix
    TranslateMatrix,

    /// scales user space by sx horizontally and sy vertically
    ///
    /// sx sy `scale` –
    Scale,

    /// sx sy matrix `scale` matrix
    ScaleMatrix,

    /// rotates user space counterclockwise by angle degrees
    ///
    /// angle `rotate` –
    Rotate,

    /// angle matrix `rotate` matrix
    RotateMatrix,

    /// composes matrix with the current transformation matrix:
    /// CTM' = matrix × CTM
    ///
    /// matrix `concat` –
    Concat,

    // Path construction
    /// initializes the current path to be empty and clears the current point
    NewPath,

    /// returns the coordinates of the current point in user space, raising
    /// nocurrentpoint when the path is empty
    ///
    /// `currentpoint` x y
    CurrentPoint,

    /// starts a new subpath at (x, y)
    ///
    /// x y `moveto` –
    MoveTo,

    /// starts a new subpath displaced (dx, dy) from the current point
    ///
    /// dx dy `rmoveto` –
    RMoveTo,

    /// appends a straight line segment from the current point to (x, y)
    ///
    /// x y `lineto` –
    LineTo,

    /// dx dy `rlineto` –
    RLineTo,

    /// appends a counterclockwise arc of a circle, connecting it to any
    /// existing current point with a straight line segment. Angles are in
    /// degrees
    ///
    /// x y r ang1 ang2 `arc` –
    Arc,

    /// like arc, but builds the arc clockwise
    ///
    /// x y r ang1 ang2 `arcn` –
    ArcN,

    /// appends a circular arc of radius r tangent to the two lines defined
    /// by the current point, (x1, y1), and (x2, y2)
    ///
    /// x1 y1 x2 y2 r `arct` –
    ArcT,

    /// like arct, but also returns the two tangent points
    ///
    /// x1 y1 x2 y2 r `arcto` xt1 yt1 xt2 yt2
    ArcTo,

    /// appends a cubic Bezier section between the current point and
    /// (x3, y3), using (x1, y1) and (x2, y2) as control points
    ///
    /// x1 y1 x2 y2 x3 y3 `curveto` –
    CurveTo,

    /// dx1 dy1 dx2 dy2 dx3 dy3 `rcurveto` –
    RCurveTo,

    /// closes the current subpath with a straight line segment back to its
    /// starting point
    ClosePath,

    /// intersects the clip region with the inside of the current path, using
    /// the nonzero winding number rule
    Clip,

    /// like clip, using the even-odd rule
    EoClip,

    /// x y width height `rectclip` –
    RectClip,

    // Painting
    /// paints a line along the current path using the current color, line
    /// width, cap, join, miter limit, and dash pattern. Clears the current
    /// path and current point
    Stroke,

    /// fills the inside of the current path, determined by the nonzero
    /// winding number rule, with the current color
    Fill,

    /// like fill, using the even-odd rule
    EoFill,

    /// x y width height `rectstroke` –
    RectStroke,

    /// x y width height `rectfill` –
    RectFill,

    /// paints string at the current point in the current font, then advances
    /// the current point by the string's width
    ///
    /// string `show` –
    Show,

    /// returns the change in the current point that would occur if string
    /// were shown
    ///
    /// string `stringwidth` wx wy
    StringWidth,

    /// appends the outlines string would paint to the current path. The
    /// boolean selects charpath's stroke-path variant
    ///
    /// string bool `charpath` –
    CharPath,

    // Type, attribute, and conversion
    /// returns a name identifying the type of any
    ///
    /// any `type` name
    Type,

    /// (convert to literal) makes the top object have the literal attribute
    CvLit,

    /// (convert to executable) makes the top object have the executable
    /// attribute
    Cvx,

    /// tests whether the operand has the executable attribute
    ///
    /// any `xcheck` bool
    XCheck,

    /// reduces the operand's access to execute-only. Access can never be
    /// upgraded
    ExecuteOnly,

    /// removes all access to the operand
    NoAccess,

    /// reduces the operand's access to read-only
    ReadOnly,

    /// tests whether the operand's access permits its value to be read
    ///
    /// array|dict|string|file `rcheck` bool
    RCheck,

    /// tests whether the operand's access permits its value to be written
    WCheck,

    /// (convert to integer) takes a number or a numeric string and produces
    /// an integer, truncating toward zero
    ///
    /// num|string `cvi` int
    Cvi,

    /// (convert to name) converts a string to a name object
    ///
    /// string `cvn` name
    Cvn,

    /// (convert to real) takes a number or a numeric string and produces a
    /// real
    ///
    /// num|string `cvr` real
    Cvr,

    /// (convert to string with radix) writes the radix representation of num
    /// into string and returns the substring written
    ///
    /// num radix string `cvrs` substring
    Cvrs,

    /// (convert to string) writes a text representation of any into string
    /// and returns the substring written
    ///
    /// any string `cvs` substring
    Cvs,

    // File
    /// returns the file object from which the interpreter is currently
    /// reading
    ///
    /// `currentfile` file
    CurrentFile,

    /// creates a filtered file that decodes data read from the underlying
    /// source. ASCII85Decode, ASCIIHexDecode, and FlateDecode are supported;
    /// other filter names raise undefinedfilename
    ///
    /// source name `filter` file
    Filter,

    /// reads bytes from file into string until the string is full or
    /// end-of-file is reached, returning the substring actually read and a
    /// boolean indicating whether the string was filled
    ///
    /// file string `readstring` substring bool
    ReadString,

    /// a file operator with no backing provider; raises undefinedfilename
    FileStub,

    // Fonts
    /// obtains the font dictionary registered under key, consulting the
    /// program's FontDirectory first and the host font registry second. An
    /// unknown font is substituted rather than raising an error
    ///
    /// key `findfont` font
    FindFont,

    /// registers font under key in FontDirectory
    ///
    /// key font `definefont` font
    DefineFont,

    /// produces a copy of font whose glyphs are scaled by scale in both
    /// dimensions: FontMatrix' = FontMatrix × scale
    ///
    /// font scale `scalefont` font'
    ScaleFont,

    /// like scalefont with a general transformation:
    /// FontMatrix' = FontMatrix × matrix
    ///
    /// font matrix `makefont` font'
    MakeFont,

    /// the combination of findfont, scalefont or makefont, and setfont
    ///
    /// key scale `selectfont` –
    /// key matrix `selectfont` –
    SelectFont,

    /// establishes font as the current font
    ///
    /// font `setfont` –
    SetFont,

    // Miscellaneous
    /// replaces executable operator names in proc by the operators
    /// themselves. For each procedure object contained within proc, bind
    /// applies itself recursively, skipping arrays that are not writable
    ///
    /// proc `bind` proc
    Bind,

    /// creates a snapshot token of the interpreter state. Virtual-memory
    /// snapshots are not maintained; the token exists so that save/restore
    /// pairs in well-formed programs execute without error
    ///
    /// `save` save
    Save,

    /// accepts a save token produced by save
    ///
    /// save `restore` –
    Restore,

    /// pushes a null object
    Null,

    /// pops an object and writes its text representation to the log
    ///
    /// any `=` –
    DebugPrint,

    /// pops an object and writes its syntactic representation to the log
    ///
    /// any `==` –
    DebugPrintFull,

    /// pops a string and writes its bytes to the log
    ///
    /// string `print` –
    Print,

    /// writes the entire operand stack to the log without disturbing it
    Stack,

    /// like stack, using syntactic representations
    PStack,
}
